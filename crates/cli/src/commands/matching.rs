//! Match command handler.
//!
//! Scores a resume PDF against a job description, quick or detailed.

use clap::Args;
use placement_core::{config::AppConfig, AppResult};
use placement_knowledge::resume::extract_resume_text;
use placement_knowledge::{ResumeMatcher, RetryPolicy};
use std::path::{Path, PathBuf};

use super::{llm_client, print_json};

/// Score a resume against a job description
#[derive(Args, Debug)]
pub struct MatchCommand {
    /// Resume PDF
    #[arg(long)]
    pub resume: PathBuf,

    /// Job description: a file path, or the text itself
    #[arg(long)]
    pub job: String,

    /// Full evaluation instead of the percentage only
    #[arg(long)]
    pub detailed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl MatchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing match command");
        config.validate()?;

        let resume = extract_resume_text(&self.resume)?;
        let job = self.job_text()?;

        let matcher = ResumeMatcher::new(llm_client(config)?, config.model.clone())
            .with_temperature(config.rag.temperature)
            .with_retry(RetryPolicy::from_config(&config.retry));

        if self.detailed {
            let result = matcher.detailed_match(&resume, &job).await?;
            if self.json {
                print_json(&serde_json::to_value(&result)?)?;
            } else {
                println!("JD match: {}%", result.jd_match);
                if result.missing_keywords.is_empty() {
                    println!("Missing keywords: none");
                } else {
                    println!("Missing keywords: {}", result.missing_keywords.join(", "));
                }
                println!("Profile summary: {}", result.profile_summary);
                println!("Strengths: {}", result.strengths);
                println!("Weaknesses: {}", result.weaknesses);
                println!("Recommended courses: {}", result.recommended_courses);
            }
        } else {
            let result = matcher.quick_match(&resume, &job).await?;
            if self.json {
                print_json(&serde_json::to_value(&result)?)?;
            } else {
                println!("JD match: {}%", result.jd_match);
            }
        }

        Ok(())
    }

    fn job_text(&self) -> AppResult<String> {
        let path = Path::new(&self.job);
        if path.is_file() {
            tracing::debug!("Reading job description from {:?}", path);
            Ok(std::fs::read_to_string(path)?)
        } else {
            Ok(self.job.clone())
        }
    }
}
