use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::attrs::{byte_tag, ByteTag, Position};
use crate::field::{SMBField, SMBFieldType};
use crate::Codec;

pub enum SMBFieldMapping<'a> {
    Struct {
        tag: Option<ByteTag>,
        fields: Vec<SMBField<'a>>,
        unit: bool,
    },
    /// A fieldless `#[repr(uN)]` enum, encoded as its discriminant.
    Enum { repr: Ident },
}

impl<'a> SMBFieldMapping<'a> {
    pub fn from_input(input: &'a DeriveInput) -> darling::Result<Self> {
        match &input.data {
            Data::Struct(data) => {
                let tag = byte_tag(&input.attrs)?;
                let (fields, unit) = match &data.fields {
                    Fields::Named(named) => {
                        let mut errors = darling::Error::accumulator();
                        let fields = named
                            .named
                            .iter()
                            .filter_map(|field| errors.handle(SMBField::from_field(field)))
                            .collect();
                        errors.finish()?;
                        (fields, false)
                    }
                    Fields::Unit => (Vec::new(), true),
                    Fields::Unnamed(_) => {
                        return Err(darling::Error::unsupported_shape("tuple struct").with_span(&input.ident));
                    }
                };
                Ok(Self::Struct { tag, fields, unit })
            }
            Data::Enum(_) => {
                let repr = input
                    .attrs
                    .iter()
                    .find(|attr| attr.path().is_ident("repr"))
                    .ok_or_else(|| darling::Error::custom("enum needs a #[repr(..)]").with_span(&input.ident))?
                    .parse_args::<Ident>()?;
                Ok(Self::Enum { repr })
            }
            Data::Union(_) => Err(darling::Error::unsupported_shape("union").with_span(&input.ident)),
        }
    }

    pub fn expand(&self, input: &DeriveInput, codec: Codec) -> darling::Result<TokenStream> {
        let name = &input.ident;
        let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
        let expanded = match codec {
            Codec::ByteSize => {
                let body = self.byte_size()?;
                quote! {
                    impl #impl_generics ::smb_core::SMBByteSize for #name #ty_generics #where_clause {
                        #[allow(unused_mut)]
                        fn smb_byte_size(&self) -> usize {
                            #body
                        }
                    }
                }
            }
            Codec::FromBytes => {
                let body = self.from_bytes()?;
                quote! {
                    impl #impl_generics ::smb_core::SMBFromBytes for #name #ty_generics #where_clause {
                        #[allow(unused_mut)]
                        fn smb_from_bytes(__smb_input: &[u8]) -> ::smb_core::SMBParseResult<&[u8], Self> where Self: Sized {
                            #body
                        }
                    }
                }
            }
            Codec::ToBytes => {
                let body = self.to_bytes()?;
                quote! {
                    impl #impl_generics ::smb_core::SMBToBytes for #name #ty_generics #where_clause {
                        #[allow(unused_mut)]
                        fn smb_to_bytes(&self) -> Vec<u8> {
                            #body
                        }
                    }
                }
            }
        };
        Ok(expanded)
    }

    fn fixed_size(tag: &Option<ByteTag>) -> usize {
        tag.as_ref().map(ByteTag::fixed_size).unwrap_or(0)
    }

    /// Variable-length fields in layout order; ties keep declaration order.
    fn variable<'b>(fields: &'b [SMBField<'a>]) -> Vec<&'b SMBField<'a>> {
        let mut variable = fields.iter().filter(|field| field.order().is_some()).collect::<Vec<_>>();
        variable.sort_by_key(|field| field.order());
        variable
    }

    fn byte_size(&self) -> darling::Result<TokenStream> {
        let (tag, fields) = match self {
            Self::Enum { repr } => return Ok(quote! { ::core::mem::size_of::<#repr>() }),
            Self::Struct { tag, fields, .. } => (tag, fields),
        };
        let fixed = Self::fixed_size(tag);
        let mut steps = Vec::new();
        for field in fields.iter().filter(|field| field.order().is_none()) {
            let name = field.name;
            steps.push(match &field.val_type {
                SMBFieldType::Direct { start } => quote! {
                    __smb_size = __smb_size.max(#start + ::smb_core::SMBByteSize::smb_byte_size(&self.#name));
                },
                SMBFieldType::Skip { start, length } => quote! {
                    __smb_size = __smb_size.max(#start + #length);
                },
                _ => TokenStream::new(),
            });
        }
        for field in Self::variable(fields) {
            let name = field.name;
            steps.push(match &field.val_type {
                SMBFieldType::Buffer { position, length, .. } => {
                    let length_end = length.start + length.width()?;
                    let placement = match position {
                        Position::Fixed(start) => quote! {
                            __smb_size = __smb_size.max(#start + ::smb_core::layout::SMBBuffer::buffer_len(&self.#name));
                        },
                        Position::Inner(offset) => {
                            let offset_end = offset.start + offset.width()?;
                            quote! {
                                __smb_size = __smb_size.max(#offset_end);
                                __smb_size += ::smb_core::layout::SMBBuffer::buffer_len(&self.#name);
                            }
                        }
                    };
                    quote! {
                        __smb_size = __smb_size.max(#length_end);
                        #placement
                    }
                }
                SMBFieldType::Vector { count, .. } => {
                    let count_end = count.start + count.width()?;
                    quote! {
                        __smb_size = __smb_size.max(#count_end);
                        __smb_size += ::smb_core::SMBByteSize::smb_byte_size(&self.#name);
                    }
                }
                _ => TokenStream::new(),
            });
        }
        let padded = tag.as_ref().map(|tag| tag.value as usize).unwrap_or(0);
        Ok(quote! {
            let mut __smb_size: usize = #fixed;
            #(#steps)*
            __smb_size.max(#padded)
        })
    }

    fn from_bytes(&self) -> darling::Result<TokenStream> {
        let (tag, fields, unit) = match self {
            Self::Enum { repr } => {
                return Ok(quote! {
                    let (__smb_remaining, __smb_raw) = <#repr as ::smb_core::SMBFromBytes>::smb_from_bytes(__smb_input)?;
                    let __smb_value = <Self as ::num_enum::TryFromPrimitive>::try_from_primitive(__smb_raw)
                        .map_err(::smb_core::error::SMBError::parse_error)?;
                    Ok((__smb_remaining, __smb_value))
                });
            }
            Self::Struct { tag, fields, unit } => (tag, fields, *unit),
        };
        let fixed = Self::fixed_size(tag);
        let tag_check = tag.as_ref().map(|tag| {
            let value = tag.value;
            quote! { ::smb_core::layout::check_byte_tag(__smb_input, #value)?; }
        });
        let mut steps = Vec::new();
        for field in fields.iter().filter(|field| field.order().is_none()) {
            let name = field.name;
            let ty = field.ty;
            steps.push(match &field.val_type {
                SMBFieldType::Direct { start } => quote! {
                    let #name: #ty = ::smb_core::layout::field_at(__smb_input, #start)?;
                    __smb_end = __smb_end.max(#start + ::smb_core::SMBByteSize::smb_byte_size(&#name));
                },
                SMBFieldType::Skip { start, length } => quote! {
                    let #name: #ty = ::core::default::Default::default();
                    __smb_end = __smb_end.max(#start + #length);
                },
                _ => TokenStream::new(),
            });
        }
        for field in Self::variable(fields) {
            let name = field.name;
            let ty = field.ty;
            steps.push(match &field.val_type {
                SMBFieldType::Buffer { position, length, .. } => {
                    let length = length.read()?;
                    let (offset, subtract) = match position {
                        Position::Fixed(start) => (quote! { #start }, 0usize),
                        Position::Inner(offset) => (offset.read()?, offset.subtract),
                    };
                    quote! {
                        let #name: #ty = {
                            let __smb_offset = #offset;
                            let __smb_length = #length;
                            let (__smb_bytes, __smb_buffer_end) =
                                ::smb_core::layout::buffer_at(__smb_input, __smb_offset, #subtract, __smb_length)?;
                            __smb_end = __smb_end.max(__smb_buffer_end);
                            ::smb_core::layout::SMBBuffer::from_buffer(__smb_bytes)?
                        };
                    }
                }
                SMBFieldType::Vector { count, .. } => {
                    let count = count.read()?;
                    quote! {
                        let #name: #ty = {
                            let __smb_count = #count;
                            let __smb_rest = __smb_input.get(__smb_end..).unwrap_or_default();
                            let (__smb_remaining, __smb_items) =
                                ::smb_core::SMBVecFromBytes::smb_from_bytes_vec(__smb_rest, __smb_count)?;
                            __smb_end = __smb_input.len() - __smb_remaining.len();
                            __smb_items
                        };
                    }
                }
                _ => TokenStream::new(),
            });
        }
        let names = fields.iter().map(|field| field.name);
        let value = if unit {
            quote! { Self }
        } else {
            quote! { Self { #(#names),* } }
        };
        Ok(quote! {
            #tag_check
            let mut __smb_end: usize = #fixed;
            #(#steps)*
            let __smb_end = __smb_end.min(__smb_input.len());
            Ok((&__smb_input[__smb_end..], #value))
        })
    }

    fn to_bytes(&self) -> darling::Result<TokenStream> {
        let (tag, fields) = match self {
            Self::Enum { repr } => {
                return Ok(quote! { ::smb_core::SMBToBytes::smb_to_bytes(&(*self as #repr)) });
            }
            Self::Struct { tag, fields, .. } => (tag, fields),
        };
        let fixed = Self::fixed_size(tag);
        let tag_write = tag.as_ref().map(|tag| {
            let value = tag.value;
            quote! { ::smb_core::layout::put_at(&mut __smb_out, 0, &#value.to_le_bytes()); }
        });
        let mut steps = Vec::new();
        for field in fields.iter().filter(|field| field.order().is_none()) {
            let name = field.name;
            steps.push(match &field.val_type {
                SMBFieldType::Direct { start } => quote! {
                    ::smb_core::layout::put_at(&mut __smb_out, #start, &::smb_core::SMBToBytes::smb_to_bytes(&self.#name));
                },
                SMBFieldType::Skip { start, length } => quote! {
                    ::smb_core::layout::reserve(&mut __smb_out, #start + #length);
                },
                _ => TokenStream::new(),
            });
        }
        for field in Self::variable(fields) {
            let name = field.name;
            steps.push(match &field.val_type {
                SMBFieldType::Buffer { position, length, .. } => {
                    let length = length.write(quote! { __smb_bytes.len() })?;
                    let placement = match position {
                        Position::Fixed(start) => quote! {
                            ::smb_core::layout::put_at(&mut __smb_out, #start, &__smb_bytes);
                        },
                        Position::Inner(offset) => {
                            let subtract = offset.subtract;
                            let offset_end = offset.start + offset.width()?;
                            let offset = offset.write(quote! { __smb_position + #subtract })?;
                            quote! {
                                ::smb_core::layout::reserve(&mut __smb_out, #offset_end);
                                let __smb_position = __smb_out.len();
                                #offset
                                __smb_out.extend_from_slice(&__smb_bytes);
                            }
                        }
                    };
                    quote! {
                        {
                            let __smb_bytes = ::smb_core::layout::SMBBuffer::to_buffer(&self.#name);
                            #length
                            #placement
                        }
                    }
                }
                SMBFieldType::Vector { count, .. } => {
                    let count = count.write(quote! { self.#name.len() })?;
                    quote! {
                        #count
                        __smb_out.extend_from_slice(&::smb_core::SMBToBytes::smb_to_bytes(&self.#name));
                    }
                }
                _ => TokenStream::new(),
            });
        }
        let padded = tag.as_ref().map(|tag| tag.value as usize).unwrap_or(0);
        Ok(quote! {
            let mut __smb_out: Vec<u8> = vec![0; #fixed];
            #tag_write
            #(#steps)*
            ::smb_core::layout::reserve(&mut __smb_out, #padded);
            __smb_out
        })
    }
}
