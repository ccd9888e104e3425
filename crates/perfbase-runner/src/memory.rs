//! Memory probe: samples the target process's allocated bytes from its
//! debug-vars endpoint (an expvar-style JSON document).

use serde::Deserialize;

use crate::error::MemoryProbeError;

#[derive(Debug, Deserialize)]
struct DebugVars {
    memstats: MemStats,
}

#[derive(Debug, Deserialize)]
struct MemStats {
    #[serde(rename = "Alloc")]
    alloc: u64,
}

/// Fetch one memory sample (allocated bytes) from the target.
pub fn sample_memory(
    client: &reqwest::blocking::Client,
    target_host: &str,
    target_port: &str,
    endpoint: &str,
) -> Result<u64, MemoryProbeError> {
    let url = format!("http://{target_host}:{target_port}{endpoint}");
    let body = client.get(&url).send()?.text()?;
    let vars: DebugVars = serde_json::from_str(&body)?;
    Ok(vars.memstats.alloc)
}
