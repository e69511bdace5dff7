use darling::FromMeta;
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use syn::Attribute;

/// `#[smb_byte_tag(value = N)]`: the StructureSize every SMB2 body opens with.
#[derive(Debug, FromMeta)]
pub struct ByteTag {
    pub value: u16,
}

impl ByteTag {
    /// Length of the fixed part. An odd StructureSize counts the first byte
    /// of the variable part, which the fixed part does not own.
    pub fn fixed_size(&self) -> usize {
        (self.value & !1) as usize
    }
}

/// An integer stored in the fixed part, such as a buffer offset or length.
#[derive(Debug, Clone, PartialEq, Eq, FromMeta)]
pub struct DirectInner {
    pub start: usize,
    pub num_type: String,
    #[darling(default)]
    pub subtract: usize,
}

impl DirectInner {
    fn ty(&self) -> darling::Result<Ident> {
        match self.num_type.as_str() {
            "u8" | "u16" | "u32" | "u64" => Ok(Ident::new(&self.num_type, Span::call_site())),
            other => Err(darling::Error::unknown_value(other)),
        }
    }

    pub fn width(&self) -> darling::Result<usize> {
        Ok(match self.ty()?.to_string().as_str() {
            "u8" => 1,
            "u16" => 2,
            "u32" => 4,
            _ => 8,
        })
    }

    pub fn read(&self) -> darling::Result<TokenStream> {
        let start = self.start;
        let ty = self.ty()?;
        Ok(quote! {
            (::smb_core::layout::field_at::<#ty>(__smb_input, #start)? as usize)
        })
    }

    pub fn write(&self, value: TokenStream) -> darling::Result<TokenStream> {
        let start = self.start;
        let ty = self.ty()?;
        Ok(quote! {
            ::smb_core::layout::put_at(&mut __smb_out, #start, &((#value) as #ty).to_le_bytes());
        })
    }
}

/// `fixed = N` or `inner(...)`.
#[derive(Debug, Default, FromMeta)]
pub struct AttributeInfo {
    #[darling(default)]
    pub fixed: Option<usize>,
    #[darling(default)]
    pub inner: Option<DirectInner>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Fixed(usize),
    Inner(DirectInner),
}

impl AttributeInfo {
    pub fn position(&self) -> darling::Result<Position> {
        match (self.fixed, &self.inner) {
            (Some(fixed), None) => Ok(Position::Fixed(fixed)),
            (None, Some(inner)) => Ok(Position::Inner(inner.clone())),
            _ => Err(darling::Error::custom("expected exactly one of `fixed` or `inner`")),
        }
    }

    pub fn inner(&self) -> darling::Result<DirectInner> {
        self.inner
            .clone()
            .ok_or_else(|| darling::Error::custom("expected `inner(start = .., num_type = ..)`"))
    }
}

#[derive(Debug, FromMeta)]
pub struct Direct {
    pub start: AttributeInfo,
}

/// Reserved bytes. They are zero on write and ignored on read.
#[derive(Debug, FromMeta)]
pub struct Skip {
    pub start: usize,
    pub length: usize,
}

/// Shared by `smb_buffer` and `smb_string`. The data sits either at a fixed
/// position (`start(fixed = ..)`) or wherever an offset field points.
#[derive(Debug, FromMeta)]
pub struct Buffer {
    #[darling(default)]
    pub order: usize,
    #[darling(default)]
    pub offset: Option<AttributeInfo>,
    #[darling(default)]
    pub start: Option<AttributeInfo>,
    pub length: AttributeInfo,
    #[darling(default)]
    pub underlying: Option<String>,
}

#[derive(Debug, FromMeta)]
pub struct Vector {
    #[darling(default)]
    pub order: usize,
    pub count: AttributeInfo,
}

pub fn find<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| attr.path().is_ident(name))
}

pub fn byte_tag(attrs: &[Attribute]) -> darling::Result<Option<ByteTag>> {
    find(attrs, "smb_byte_tag")
        .map(|attr| ByteTag::from_meta(&attr.meta))
        .transpose()
}
