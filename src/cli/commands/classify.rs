//! Classify command: changed functions and their verdicts, no graph access

use anyhow::Result;

use testradar::config::Config;
use testradar::{format_function_changes, ChangeClassifier};

use super::DiffSource;

pub(crate) fn cmd_classify(diff: DiffSource<'_>, json: bool, config: &Config) -> Result<()> {
    let _span = tracing::info_span!("cmd_classify").entered();

    let diff_text = diff.read()?;
    let classifier = ChangeClassifier::new(config.structural_or_default());
    let changes = classifier.classify_diff(&diff_text);

    if json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else {
        println!("{}", format_function_changes(&changes));
    }
    Ok(())
}
