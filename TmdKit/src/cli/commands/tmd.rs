//! TMD CLI commands
//!
//! Commands for inspecting, dumping, and re-encoding TMD models.

use std::path::Path;

use anyhow::{Context, bail};

use crate::formats::tmd::{
    DecodeLoss, DecodeOptions, ModelFile, ObjectEntry, PacketShape, parse_tmd_bytes, parse_tmd_bytes_with,
    serialize_tmd, write_tmd,
};

fn load(path: &Path, options: DecodeOptions) -> anyhow::Result<ModelFile> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode(path, &bytes, options)
}

fn decode(path: &Path, bytes: &[u8], options: DecodeOptions) -> anyhow::Result<ModelFile> {
    let model = parse_tmd_bytes_with(bytes, &options).with_context(|| format!("Failed to decode {}", path.display()))?;
    report_losses(&model);
    Ok(model)
}

fn report_losses(model: &ModelFile) {
    for loss in model.losses() {
        match loss {
            DecodeLoss::Packet { object, packet, offset, header } => tracing::warn!(
                "Skipped packet {packet} of object {object} at {offset:#x} (flag {:#04x}, mode {:#04x})",
                header.flag.raw(),
                header.mode.raw()
            ),
            DecodeLoss::Object { object, packet, offset, header } => tracing::warn!(
                "Dropped object {object}: packet {packet} at {offset:#x} (flag {:#04x}, mode {:#04x})",
                header.flag.raw(),
                header.mode.raw()
            ),
        }
    }
}

/// Print the object table and a histogram of packet shapes.
pub fn info(path: &Path, options: DecodeOptions) -> anyhow::Result<()> {
    let model = load(path, options)?;

    println!("TMD File Information");
    println!("====================");
    println!("Flags:       {:#x}", model.flags());
    println!("Addressing:  {}", if model.is_absolute() { "absolute" } else { "relative" });
    println!("Objects:     {}", model.objects().len());
    println!("Vertices:    {}", model.total_vertices());
    if !model.is_lossless() {
        println!("Losses:      {}", model.losses().len());
    }
    println!();

    println!("Objects:");
    println!("--------");
    for (index, object) in model.objects().iter().enumerate() {
        println!(
            "  [{:3}] {:5} primitives | {:5} vertices | {:5} normals | scale 2^{} ({})",
            index,
            object.primitives().len(),
            object.vertices().len(),
            object.normals().len(),
            object.scale_exponent(),
            object.scale()
        );
    }

    let mut histogram = [0usize; PacketShape::ALL.len()];
    for primitive in model.objects().iter().flat_map(ObjectEntry::primitives) {
        if let Some(slot) = PacketShape::ALL.iter().position(|&shape| shape == primitive.shape()) {
            histogram[slot] += 1;
        }
    }

    println!();
    println!("Packet shapes:");
    println!("--------------");
    for (shape, count) in PacketShape::ALL.iter().zip(histogram) {
        if count > 0 {
            println!("  {:18} {:6}", shape.to_string(), count);
        }
    }

    Ok(())
}

/// Write the decoded tree as JSON.
pub fn dump(path: &Path, output: &Path, options: DecodeOptions) -> anyhow::Result<()> {
    println!("Dumping TMD to JSON: {}", path.display());

    let model = load(path, options)?;
    let json = serde_json::to_string_pretty(&model)?;
    std::fs::write(output, json)?;

    println!("Written to: {}", output.display());
    Ok(())
}

/// Decode and write back in canonical layout.
pub fn rewrite(path: &Path, output: &Path, options: DecodeOptions) -> anyhow::Result<()> {
    let model = load(path, options)?;
    write_tmd(output, &model).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Rewrote {} objects ({} vertices) to {}", model.objects().len(), model.total_vertices(), output.display());
    Ok(())
}

/// Decode, encode and decode again, then compare.
///
/// The first encode may move blocks around; from then on the encoding must be
/// a fixed point and every object must keep its content. Data dropped by a
/// lossy first decode is reported and left out of the comparison.
pub fn verify(path: &Path, options: DecodeOptions) -> anyhow::Result<()> {
    let original = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let first = decode(path, &original, options)?;
    let encoded = serialize_tmd(&first)?;
    let second = parse_tmd_bytes(&encoded).context("Re-encoded model does not decode")?;
    let reencoded = serialize_tmd(&second)?;

    if first.objects().len() != second.objects().len() {
        bail!("Object count changed: {} -> {}", first.objects().len(), second.objects().len());
    }
    for (index, (a, b)) in first.objects().iter().zip(second.objects()).enumerate() {
        if a.primitives() != b.primitives() {
            bail!("Object {index}: primitives differ after re-encoding");
        }
        if a.vertices() != b.vertices() {
            bail!("Object {index}: vertices differ after re-encoding");
        }
        if a.normals() != b.normals() {
            bail!("Object {index}: normals differ after re-encoding");
        }
        if a.scale_exponent() != b.scale_exponent() {
            bail!("Object {index}: scale changed after re-encoding");
        }
    }
    if encoded != reencoded {
        bail!("Canonical encoding is not stable");
    }

    if encoded == original {
        println!("OK: {} is byte-identical after re-encoding", path.display());
    } else {
        println!(
            "OK: {} round-trips ({} -> {} bytes, blocks re-laid out)",
            path.display(),
            original.len(),
            encoded.len()
        );
    }
    Ok(())
}
