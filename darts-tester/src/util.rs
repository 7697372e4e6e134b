use anyhow::{Context, Result, bail};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse a comma-separated seed list; `0x`-prefixed values are read as hex.
pub fn parse_seeds(s: &str) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in split_csv(s) {
        let seed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
            None => token.replace('_', "").parse::<u64>(),
        }
        .with_context(|| format!("invalid seed '{token}'"))?;
        seeds.push(seed);
    }
    if seeds.is_empty() {
        bail!("at least one seed is required");
    }
    Ok(seeds)
}
