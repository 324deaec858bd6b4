//! Cross-reference table and trailer.

use super::FragmentWriter;
use crate::error::{Error, Result};
use crate::object::{ObjectRef, SharedObjectTable};
use crate::sink::PositionInfo;

/// Trailer entries other than `/Size`.
#[derive(Debug, Clone)]
pub struct Trailer {
    /// Document catalog
    pub root: ObjectRef,
    /// Info dictionary
    pub info: Option<ObjectRef>,
    /// File identifier; both `/ID` entries carry it
    pub file_id: [u8; 16],
    /// Encryption dictionary
    pub encrypt: Option<ObjectRef>,
}

/// Classic `xref` section over every allocated reference.
///
/// Entries follow allocation order, not file order.
pub struct XrefTable {
    objects: SharedObjectTable,
}

impl XrefTable {
    /// Table over the references of `objects`.
    pub fn new(objects: SharedObjectTable) -> Self {
        Self { objects }
    }

    /// Write the table, trailer, `startxref` and `%%EOF` through `writer`.
    ///
    /// `positions` must include the fragment `writer` currently writes to.
    /// Fails if any writer of the document was dropped mid-token. Returns the
    /// table's own offset.
    pub fn close(
        &self,
        writer: &mut FragmentWriter,
        positions: &PositionInfo,
        trailer: &Trailer,
    ) -> Result<u64> {
        writer.context().ensure_intact()?;
        let offsets = self.objects.borrow().resolve(positions)?;
        let (fragment, offset) = writer.position();
        let start = positions
            .base_offset(fragment)
            .ok_or_else(|| Error::illegal("xref fragment has no known position"))?
            + offset;

        let size = offsets.len() + 1;
        let mut table = String::with_capacity(32 + size * 20);
        table.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", size));
        for entry in &offsets {
            table.push_str(&format!("{:010} 00000 n \n", entry));
        }
        table.push_str("trailer\n");
        writer.write_raw(table.as_bytes())?;

        writer.start_hash()?;
        writer.write_name("Size")?;
        writer.write_int(size as i64)?;
        writer.write_name("Root")?;
        writer.write_object_ref(trailer.root)?;
        if let Some(info) = trailer.info {
            writer.write_name("Info")?;
            writer.write_object_ref(info)?;
        }
        writer.write_name("ID")?;
        writer.start_array()?;
        writer.write_bytes(&trailer.file_id)?;
        writer.write_bytes(&trailer.file_id)?;
        writer.end_array()?;
        if let Some(encrypt) = trailer.encrypt {
            writer.write_name("Encrypt")?;
            writer.write_object_ref(encrypt)?;
        }
        writer.end_hash()?;
        writer.write_raw(format!("\nstartxref\n{}\n%%EOF\n", start).as_bytes())?;

        log::debug!("xref: {} entries at offset {}", size, start);
        Ok(start)
    }
}
