//! `rehash to-git`: restore dual-hash objects to their source form

use camino::Utf8Path;
use rehash_config::{OutputFormat, RehashToml};
use rehash_core::error::RehashResult;
use rehash_resolver::spawn_restore;

use super::{write_stream, CommandContext};
use crate::io;

/// Restore the framed stream at `input`; returns the object count
pub async fn execute(
    input: &Utf8Path,
    output: &Utf8Path,
    config: &RehashToml,
    ctx: &CommandContext,
) -> RehashResult<usize> {
    let source = io::spawn_reader(Box::new(io::open_frames(input)?));
    let mut stream = spawn_restore(source, config.target.algorithm);

    let restored = match config.output.format {
        OutputFormat::Stream => {
            let mut writer = io::create_frames(output)?;
            let written = write_stream(stream, &mut writer).await?;
            writer.finish()?;
            written
        }
        OutputFormat::Loose => {
            let mut written = 0;
            while let Some(object) = stream.next().await {
                io::write_loose_object(output, &object?)?;
                written += 1;
            }
            written
        }
    };

    if restored == 0 {
        ctx.output.warn(&format!("{} holds no objects", input));
    }
    ctx.output
        .success(&format!("Restored {} objects into {} ({})", restored, output, config.output.format));
    Ok(restored)
}
