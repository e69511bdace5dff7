use darling::FromMeta;
use proc_macro2::Ident;
use syn::{Field, Type};

use crate::attrs::{find, Buffer, Direct, DirectInner, Position, Skip, Vector};

#[derive(Debug, PartialEq, Eq)]
pub enum SMBFieldType {
    Direct { start: usize },
    Skip { start: usize, length: usize },
    Buffer { order: usize, position: Position, length: DirectInner },
    Vector { order: usize, count: DirectInner },
}

#[derive(Debug)]
pub struct SMBField<'a> {
    pub name: &'a Ident,
    pub ty: &'a Type,
    pub val_type: SMBFieldType,
}

impl<'a> SMBField<'a> {
    pub fn from_field(field: &'a Field) -> darling::Result<Self> {
        let name = field
            .ident
            .as_ref()
            .ok_or_else(|| darling::Error::unsupported_shape("tuple field").with_span(field))?;
        let val_type = Self::val_type(field)?;
        Ok(Self { name, ty: &field.ty, val_type })
    }

    fn val_type(field: &Field) -> darling::Result<SMBFieldType> {
        let attrs = &field.attrs;
        if let Some(attr) = find(attrs, "smb_direct") {
            let direct = Direct::from_meta(&attr.meta)?;
            return match direct.start.position()? {
                Position::Fixed(start) => Ok(SMBFieldType::Direct { start }),
                Position::Inner(_) => Err(darling::Error::custom("direct fields need a fixed start").with_span(attr)),
            };
        }
        if let Some(attr) = find(attrs, "smb_skip") {
            let Skip { start, length } = Skip::from_meta(&attr.meta)?;
            return Ok(SMBFieldType::Skip { start, length });
        }
        if let Some(attr) = find(attrs, "smb_buffer").or_else(|| find(attrs, "smb_string")) {
            let buffer = Buffer::from_meta(&attr.meta)?;
            if let Some(underlying) = buffer.underlying.as_deref() {
                if underlying != "u8" && underlying != "u16" {
                    return Err(darling::Error::unknown_value(underlying).with_span(attr));
                }
            }
            let position = match (&buffer.offset, &buffer.start) {
                (Some(info), None) | (None, Some(info)) => info.position()?,
                _ => return Err(darling::Error::custom("expected one of `offset` or `start`").with_span(attr)),
            };
            return Ok(SMBFieldType::Buffer { order: buffer.order, position, length: buffer.length.inner()? });
        }
        if let Some(attr) = find(attrs, "smb_vector") {
            let vector = Vector::from_meta(&attr.meta)?;
            return Ok(SMBFieldType::Vector { order: vector.order, count: vector.count.inner()? });
        }
        Err(darling::Error::custom(
            "field needs one of smb_direct, smb_skip, smb_buffer, smb_string or smb_vector",
        ).with_span(field))
    }

    /// Position among the variable-length fields, which are laid out after
    /// the fixed part in this order.
    pub fn order(&self) -> Option<usize> {
        match &self.val_type {
            SMBFieldType::Buffer { order, .. } | SMBFieldType::Vector { order, .. } => Some(*order),
            _ => None,
        }
    }
}
