//! `rehash from-git`: rewrite source objects into the dual-hash form

use camino::Utf8Path;
use rehash_config::RehashToml;
use rehash_core::error::{RehashError, RehashResult};
use rehash_resolver::{spawn_rewrite, MapLookup, NoLookup};
use tracing::debug;

use super::{write_stream, CommandContext};
use crate::io;

/// Rewrite `input` into a framed stream at `output`; returns the object count
pub async fn execute(
    input: &Utf8Path,
    output: &Utf8Path,
    config: &RehashToml,
    ctx: &CommandContext,
) -> RehashResult<usize> {
    let algorithm = config.target.algorithm;
    let source = io::spawn_reader(io::open_input(input)?);
    let mut writer = io::create_frames(output)?;

    let lookup = load_lookup(config).await?;
    if let Some(lookup) = &lookup {
        ctx.output
            .info(&format!("Resolving missing objects from {} lookup entries", lookup.len()));
    }
    let written = match lookup {
        Some(lookup) => write_stream(spawn_rewrite(source, lookup, algorithm), &mut writer).await?,
        None => write_stream(spawn_rewrite(source, NoLookup, algorithm), &mut writer).await?,
    };
    writer.finish()?;

    ctx.output
        .success(&format!("Rewrote {} objects into {} ({})", written, output, algorithm));
    Ok(written)
}

async fn load_lookup(config: &RehashToml) -> RehashResult<Option<MapLookup>> {
    let Some(path) = &config.lookup.map else {
        return Ok(None);
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RehashError::io(format!("Failed to read lookup map {}", path), e))?;
    let lookup = MapLookup::from_json(&json)?;
    debug!("Loaded {} lookup entries from {}", lookup.len(), path);
    Ok(Some(lookup))
}
