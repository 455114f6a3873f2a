//! Process command: asks a running server to re-run the pipeline for a lesson.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::ConfigLoader;

/// Arguments for the process command
#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Lesson (clase) id to re-process
    #[arg(long = "clase-id")]
    pub clase_id: Uuid,

    /// Server base URL (defaults to the configured host and port)
    #[arg(long)]
    pub server: Option<String>,
}

/// Run the process command
pub async fn run(args: ProcessArgs) -> Result<()> {
    let base = match args.server {
        Some(server) => server.trim_end_matches('/').to_string(),
        None => {
            let config = ConfigLoader::load()?;
            format!("http://{}:{}", config.server.host, config.server.port)
        }
    };
    let job_secret = std::env::var("AULA_JOB_SECRET")
        .context("environment variable AULA_JOB_SECRET is not set")?;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/api/clases/process"))
        .bearer_auth(job_secret.trim())
        .json(&json!({ "claseId": args.clase_id }))
        .send()
        .await
        .with_context(|| format!("could not reach the server at {base}"))?;

    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let detail = body["error"].as_str().unwrap_or("unknown error");
        bail!("processing failed ({status}): {detail}");
    }

    println!("Lesson {} processed", args.clase_id);
    println!("  Passages:  {}", body["pasajes"]);
    println!("  Chunks:    {}", body["segmentos"]);
    println!("  Duration:  {}s", body["duracionSegundos"]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_args_parse() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            process: ProcessArgs,
        }

        let id = Uuid::new_v4();
        let cli = TestCli::parse_from(["test", "--clase-id", &id.to_string()]);
        assert_eq!(cli.process.clase_id, id);
        assert!(cli.process.server.is_none());
    }

    #[test]
    fn process_args_require_valid_uuid() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            process: ProcessArgs,
        }

        let result = TestCli::try_parse_from(["test", "--clase-id", "not-a-uuid"]);
        assert!(result.is_err());
    }
}
