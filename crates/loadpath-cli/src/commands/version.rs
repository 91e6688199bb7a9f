use loadpath_core::version::{version_string, ARTIFACT_FORMAT_VERSION};
use loadpath_core::VERSION;
use miette::Result;

pub fn run(json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "version": VERSION,
            "artifact_format": ARTIFACT_FORMAT_VERSION,
        });
        println!("{value}");
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
