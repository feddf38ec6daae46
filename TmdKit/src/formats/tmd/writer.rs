//! TMD encoding
//!
//! The writer always produces the canonical layout: file header, object
//! table, then the primitive blocks of every object, the vertex blocks of
//! every object and the normal blocks of every object, each group in table
//! order. Addresses and counts in the object table are recomputed from the
//! tree; the stored ones are ignored.

use super::{Block, HEADER_SIZE, ModelFile, NORMAL_SIZE, OBJECT_HEADER_SIZE, ObjectHeader, TMD_MAGIC, VERTEX_SIZE};
use crate::error::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

/// Write a .tmd file to disk
///
/// # Errors
/// Returns an error if the model cannot be encoded or file writing fails.
pub fn write_tmd<P: AsRef<Path>>(path: P, model: &ModelFile) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    model.write(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Encode a model to bytes
///
/// # Errors
/// Returns [`Error::UnwritableShape`] or [`Error::LayoutOverflow`] if the model has no
/// valid encoding.
///
/// [`Error::UnwritableShape`]: crate::Error::UnwritableShape
/// [`Error::LayoutOverflow`]: crate::Error::LayoutOverflow
pub fn serialize_tmd(model: &ModelFile) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    model.write(&mut cursor)?;
    Ok(cursor.into_inner())
}

impl ModelFile {
    /// Encode the model at the writer's current position.
    ///
    /// Only `stream_position` is queried; the writer is never seeked. With
    /// absolute addressing, block addresses are stream positions, so the
    /// encoding depends on where the writer starts.
    ///
    /// Nothing is written if the model fails validation.
    ///
    /// # Errors
    /// Returns [`Error::UnwritableShape`] for a packet whose facets do not match its
    /// shape, [`Error::LayoutOverflow`] if an address or count exceeds 32 bits and
    /// [`Error::Io`] if writing fails.
    ///
    /// [`Error::UnwritableShape`]: crate::Error::UnwritableShape
    /// [`Error::LayoutOverflow`]: crate::Error::LayoutOverflow
    /// [`Error::Io`]: crate::Error::Io
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        self.check_writable()?;

        let base = writer.stream_position()?;
        let headers = self.plan_layout(base)?;

        writer.write_u32::<LittleEndian>(TMD_MAGIC)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(headers.len() as u32)?;

        for header in &headers {
            header.write(writer)?;
        }
        for object in &self.objects {
            for primitive in &object.primitives {
                primitive.write(writer)?;
            }
        }
        for object in &self.objects {
            for vertex in &object.vertices {
                vertex.write(writer)?;
            }
        }
        for object in &self.objects {
            for normal in &object.normals {
                normal.write(writer)?;
            }
        }

        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        for (object, entry) in self.objects.iter().enumerate() {
            for (packet, primitive) in entry.primitives.iter().enumerate() {
                if let Err(reason) = primitive.check_writable() {
                    let header = primitive.header();
                    return Err(Error::UnwritableShape {
                        object,
                        packet,
                        output_length: header.output_length,
                        input_length: header.input_length,
                        flag: header.flag.raw(),
                        mode: header.mode.raw(),
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    /// Compute the object table for a model written at stream position `base`.
    fn plan_layout(&self, base: u64) -> Result<Vec<ObjectHeader>> {
        let table_base = base + HEADER_SIZE as u64;
        let mut offset = table_base + (self.objects.len() * OBJECT_HEADER_SIZE) as u64;
        let absolute = self.is_absolute();

        let address = |object: usize, block: Block, offset: u64| -> Result<u32> {
            let stored = if absolute { offset } else { offset - table_base };
            u32::try_from(stored).map_err(|_| Error::LayoutOverflow { object, block })
        };
        let count = |object: usize, block: Block, len: usize| -> Result<u32> {
            u32::try_from(len).map_err(|_| Error::LayoutOverflow { object, block })
        };

        let mut headers: Vec<ObjectHeader> = self
            .objects
            .iter()
            .map(|object| ObjectHeader { scale_exponent: object.scale_exponent(), ..ObjectHeader::default() })
            .collect();

        for (index, (object, header)) in self.objects.iter().zip(&mut headers).enumerate() {
            header.primitive_address = address(index, Block::Primitives, offset)?;
            header.primitive_count = count(index, Block::Primitives, object.primitives.len())?;
            offset += object.primitives.iter().map(|p| p.encoded_size() as u64).sum::<u64>();
        }
        for (index, (object, header)) in self.objects.iter().zip(&mut headers).enumerate() {
            header.vertex_address = address(index, Block::Vertices, offset)?;
            header.vertex_count = count(index, Block::Vertices, object.vertices.len())?;
            offset += (object.vertices.len() * VERTEX_SIZE) as u64;
        }
        for (index, (object, header)) in self.objects.iter().zip(&mut headers).enumerate() {
            header.normal_address = address(index, Block::Normals, offset)?;
            header.normal_count = count(index, Block::Normals, object.normals.len())?;
            offset += (object.normals.len() * NORMAL_SIZE) as u64;
        }

        tracing::debug!(
            "TMD layout: {} objects, table at {:#x}, {} bytes total",
            headers.len(),
            table_base,
            offset - base
        );

        Ok(headers)
    }
}
