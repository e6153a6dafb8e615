use anyhow::{bail, Context, Result};
use sqlx::PgPool;
use std::path::{Path, PathBuf};

/// `*.sql` files in `dir`, in lexical order.
pub fn migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run every migration file in order, stopping at the first failure.
/// Files are written to be re-runnable (`IF NOT EXISTS`).
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<usize> {
    let files = migration_files(dir)?;
    if files.is_empty() {
        bail!("no .sql files found in {}", dir.display());
    }

    for file in &files {
        let sql = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        sqlx::raw_sql(&sql)
            .execute(pool)
            .await
            .with_context(|| format!("migration {} failed", file.display()))?;
        tracing::info!(file = %file.display(), "✅ Migration applied");
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["002_courses.sql", "001_users.sql", "README.md", "010_late.sql"] {
            std::fs::write(dir.path().join(name), "SELECT 1;").unwrap();
        }

        let files = migration_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["001_users.sql", "002_courses.sql", "010_late.sql"]);
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(migration_files(Path::new("/nonexistent/migrations")).is_err());
    }

    #[test]
    fn test_shipped_migrations_present() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let files = migration_files(&dir).unwrap();
        assert!(files.len() >= 5);
    }
}
