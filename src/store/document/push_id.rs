use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// Keys sort lexicographically in creation order: 8 chars of millisecond
// timestamp followed by 12 random chars, incremented within the same ms.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

#[derive(Default)]
pub struct PushIdGenerator {
    state: Mutex<(u64, [u8; 12])>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.next_id_at(now)
    }

    fn next_id_at(&self, now_ms: u64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (last_ms, last_rand) = &mut *state;

        if now_ms <= *last_ms && *last_ms != 0 {
            increment(last_rand);
        } else {
            *last_ms = now_ms;
            let random = Uuid::new_v4();
            for (slot, byte) in last_rand.iter_mut().zip(random.as_bytes()) {
                *slot = byte % 64;
            }
        }

        let mut id = String::with_capacity(20);
        let mut ts = *last_ms;
        let mut ts_chars = [0u8; 8];
        for slot in ts_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        id.extend(ts_chars.iter().map(|&c| c as char));
        id.extend(last_rand.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }
}

fn increment(rand: &mut [u8; 12]) {
    for digit in rand.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
