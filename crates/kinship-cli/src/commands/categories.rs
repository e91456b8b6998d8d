use anyhow::Result;
use kinship_core::RelationshipCategory;

use crate::cli::OutputFormat;

pub fn execute(format: OutputFormat) -> Result<()> {
    let names: Vec<&str> = RelationshipCategory::PRECEDENCE
        .iter()
        .map(RelationshipCategory::as_str)
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
        OutputFormat::Table => {
            for (rank, name) in names.iter().enumerate() {
                println!("{:>2}  {}", rank + 1, name);
            }
        }
    }
    Ok(())
}
