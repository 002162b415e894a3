use crate::areas::repository::GitRepository;
use colored::Colorize;
use std::io::Write;

impl GitRepository {
    /// List every commit found, oldest first, the order history scans use
    pub fn rev_list(&self, writer: &mut dyn Write) -> anyhow::Result<()> {
        for commit in self.commits() {
            let date = commit
                .committed_at()
                .map(|date| date.format("%Y-%m-%d %H:%M:%S %z").to_string())
                .unwrap_or_else(|| "unknown date".to_string());
            writeln!(
                writer,
                "{} {} {}",
                commit.id().to_string().yellow(),
                date,
                commit.committer()
            )?;
        }

        Ok(())
    }
}
