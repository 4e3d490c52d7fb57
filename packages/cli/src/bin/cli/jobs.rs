// ABOUTME: Operator commands over the control plane API
// ABOUTME: Inspect queues and history, submit, claim, cancel, delete, and fetch job output

use anyhow::{bail, Context};
use clap::Subcommand;
use colored::*;
use hill_core::{NewJob, DEFAULT_MOUNT};
use std::path::{Path, PathBuf};

use super::{client, print_json};

#[derive(Subcommand)]
pub enum JobCommands {
    /// List queued jobs, oldest first
    Queue {
        /// Only jobs assigned to this robot
        robot: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// List running and completed jobs, newest first
    History {
        /// Only jobs assigned to this robot
        robot: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Submit a job with a code archive (.tar.gz) or a directory to pack
    Submit {
        /// Container image to run
        #[arg(long)]
        container: String,
        /// Robot to run on; any robot may claim the job when omitted
        #[arg(long, default_value = "")]
        robot: String,
        /// Container path of the output directory
        #[arg(long, default_value = DEFAULT_MOUNT)]
        mount: String,
        /// Shell command run in the code directory
        #[arg(long)]
        command: String,
        /// Code archive or directory
        code: PathBuf,
        #[arg(long)]
        url: Option<String>,
    },
    /// Claim the next job for a robot, as its daemon would
    Pop {
        robot: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Show one job
    Show {
        id: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Cancel a running job (use `delete` for queued jobs)
    Cancel {
        id: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Delete a job and its artifacts
    Delete {
        id: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Download a job's output archive
    Output {
        id: String,
        /// Destination file, defaults to <id>-output.tar.gz
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },
    /// List robots that polled recently
    Activity {
        /// Window in seconds
        #[arg(long, default_value = "60")]
        seconds: i64,
        #[arg(long)]
        url: Option<String>,
    },
}

pub async fn handle_job_command(command: JobCommands) -> anyhow::Result<()> {
    match command {
        JobCommands::Queue { robot, url } => {
            print_json(&client(url)?.list_queue(robot.as_deref()).await?)
        }
        JobCommands::History { robot, url } => {
            print_json(&client(url)?.list_history(robot.as_deref()).await?)
        }
        JobCommands::Submit {
            container,
            robot,
            mount,
            command,
            code,
            url,
        } => {
            let archive = read_code(&code).await?;
            let job = NewJob::new(container, command)
                .for_robot(robot)
                .with_mount(mount);
            let created = client(url)?.submit(&job, archive).await?;
            eprintln!("{} {}", "Submitted".green().bold(), created.id);
            print_json(&created)
        }
        JobCommands::Pop { robot, url } => {
            let claimed = client(url)?.claim(&robot).await?;
            if claimed.is_none() {
                eprintln!("{} no job queued for {}", "Idle".dimmed(), robot);
            }
            print_json(&claimed)
        }
        JobCommands::Show { id, url } => print_json(&client(url)?.get_job(&id).await?),
        JobCommands::Cancel { id, url } => {
            let job = client(url)?.cancel(&id).await?;
            eprintln!("{} {}", "Cancelled".yellow().bold(), job.id);
            print_json(&job)
        }
        JobCommands::Delete { id, url } => print_json(&client(url)?.delete_job(&id).await?),
        JobCommands::Output { id, out, url } => {
            let bytes = client(url)?.download_output(&id).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{id}-output.tar.gz")));
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            eprintln!(
                "{} {} bytes to {}",
                "Saved".green().bold(),
                bytes.len(),
                out.display()
            );
            Ok(())
        }
        JobCommands::Activity { seconds, url } => {
            print_json(&client(url)?.active_robots(seconds).await?)
        }
    }
}

async fn read_code(path: &Path) -> anyhow::Result<Vec<u8>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    if metadata.is_dir() {
        let dir = path.to_path_buf();
        let archive =
            tokio::task::spawn_blocking(move || hill_daemon::workspace::pack_directory(&dir))
                .await??;
        return Ok(archive);
    }

    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        bail!("code archive {} is empty", path.display());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: JobCommands,
    }

    #[test]
    fn test_pop_parses_robot_and_url() {
        let parsed =
            Harness::try_parse_from(["hill", "pop", "r1", "--url", "http://10.0.0.5:8000"]).unwrap();
        match parsed.command {
            JobCommands::Pop { robot, url } => {
                assert_eq!(robot, "r1");
                assert_eq!(url.as_deref(), Some("http://10.0.0.5:8000"));
            }
            _ => panic!("expected pop"),
        }

        assert!(Harness::try_parse_from(["hill", "pop"]).is_err());
    }

    #[test]
    fn test_cancel_help_points_queued_jobs_to_delete() {
        let command = Harness::command();
        let about = command
            .find_subcommand("cancel")
            .and_then(|cancel| cancel.get_about())
            .unwrap()
            .to_string();
        assert!(about.starts_with("Cancel a running job"));
        assert!(about.contains("delete"));
        assert!(!about.contains("queued or running"));
    }
}
