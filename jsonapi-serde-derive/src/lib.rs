extern crate proc_macro;
#[macro_use]
extern crate thiserror;
#[macro_use]
extern crate lazy_static;

mod error;
mod field;

use crate::error::EntityDecoratorError;
use crate::field::{get_field_type, FieldType};
use proc_macro::TokenStream;
use quote::quote;
use syn::DeriveInput;

struct FieldBundle<'a> {
    id: &'a syn::Ident,
    attrs: Vec<&'a syn::Field>,
    read_onlys: Vec<&'a syn::Field>,
    skips: Vec<&'a syn::Ident>,
    to_ones: Vec<&'a syn::Field>,
    to_manys: Vec<&'a syn::Field>,
}

/// Implements `Entity` and `Described` for a named struct, plus `FromResource` when the
/// struct has no relationships
///
/// `FromResource` parses the id with `FromStr`, and `read_only` fields fall back to
/// `Default` when absent, as do `skip` fields.
///
/// ```ignore
/// #[derive(EntityDecorator)]
/// #[entity(type = "dogs")]
/// pub struct Dog {
///     #[entity(id)]
///     pub id: String,
///     pub name: String,
///     #[entity(to_one)]
///     pub owner: Option<Person>,
/// }
/// ```
#[proc_macro_derive(EntityDecorator, attributes(entity))]
pub fn derive(input: TokenStream) -> TokenStream {
    inner_derive(input).unwrap_or_else(|err| err.to_compile_error()).into()
}

fn field_name(field: &syn::Field) -> String {
    field.ident.as_ref().map(ToString::to_string).unwrap_or_default().trim_start_matches("r#").to_owned()
}

fn attribute_descriptors(fields: &[&syn::Field], read_only: bool) -> Vec<proc_macro2::TokenStream> {
    fields
        .iter()
        .map(|field| {
            let name = field_name(field);
            let ty = &field.ty;
            quote! {
                .with_attribute({
                    let allow_null = <#ty as jsonapi_serde::model::attribute::AttributeField>::allow_null();
                    jsonapi_serde::descriptor::ResourceAttributeDescriptor::new(
                        <#ty as jsonapi_serde::model::attribute::AttributeField>::attribute_type(),
                        #name,
                    )
                    .allow_null(allow_null)
                    .required_on_creation(!allow_null && !#read_only)
                    .read_only(#read_only)
                })
            }
        })
        .collect()
}

fn relationship_descriptors(fields: &[&syn::Field], to_many: bool) -> Vec<proc_macro2::TokenStream> {
    fields
        .iter()
        .map(|field| {
            let name = field_name(field);
            let ty = &field.ty;
            if to_many {
                quote! {
                    .with_relationship(jsonapi_serde::descriptor::ResourceRelationshipDescriptor::to_many(
                        #name,
                        <#ty as jsonapi_serde::entity::ToManyField>::destination(),
                    ))
                }
            } else {
                quote! {
                    .with_relationship(jsonapi_serde::descriptor::ResourceRelationshipDescriptor::to_one(
                        #name,
                        <#ty as jsonapi_serde::entity::ToOneField>::destination(),
                    ))
                }
            }
        })
        .collect()
}

fn from_resource(ast: &DeriveInput, entity_type: &str, fields: &FieldBundle) -> proc_macro2::TokenStream {
    let decorated_struct = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let id = fields.id;
    let attrs = fields.attrs.iter().map(|f| &f.ident);
    let attr_names = fields.attrs.iter().map(|f| field_name(f));
    let read_onlys = fields.read_onlys.iter().map(|f| &f.ident);
    let read_only_names = fields.read_onlys.iter().map(|f| field_name(f));
    let skips = &fields.skips;
    quote! {
        impl #impl_generics jsonapi_serde::entity::FromResource for #decorated_struct #ty_generics #where_clause {
            fn from_resource(
                repr: &jsonapi_serde::model::resource::ResourceRepr,
            ) -> std::result::Result<Self, jsonapi_serde::error::MapperError> {
                if repr.ty != #entity_type {
                    return Err(jsonapi_serde::error::MapperError::UnknownResourceType {
                        name: repr.ty.clone(),
                        pointer: repr.source.as_ref().map(|p| p.join("type")),
                    });
                }
                Ok(Self {
                    #id: jsonapi_serde::entity::extract_id(repr)?,
                    #( #attrs: jsonapi_serde::entity::extract_attribute(repr, #attr_names)?, )*
                    #(
                        #read_onlys: jsonapi_serde::entity::extract_optional_attribute(repr, #read_only_names)?
                            .unwrap_or_default(),
                    )*
                    #( #skips: std::default::Default::default(), )*
                })
            }
        }
    }
}

fn inner_derive(input: TokenStream) -> syn::Result<proc_macro2::TokenStream> {
    let ast: DeriveInput = syn::parse(input)?;
    let decorated_struct: &syn::Ident = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let entity_type = get_entity_type(&ast)?;
    let fields = get_fields(&ast)?;

    let id = fields.id;
    let all_attrs: Vec<&syn::Field> = fields.attrs.iter().chain(fields.read_onlys.iter()).copied().collect();
    let attr_idents = all_attrs.iter().map(|f| &f.ident);
    let attr_names = all_attrs.iter().map(|f| field_name(f));
    let to_one_idents = fields.to_ones.iter().map(|f| &f.ident);
    let to_one_names = fields.to_ones.iter().map(|f| field_name(f));
    let to_many_idents = fields.to_manys.iter().map(|f| &f.ident);
    let to_many_names = fields.to_manys.iter().map(|f| field_name(f));

    let mut descriptor_parts = attribute_descriptors(&fields.attrs, false);
    descriptor_parts.extend(attribute_descriptors(&fields.read_onlys, true));
    descriptor_parts.extend(relationship_descriptors(&fields.to_ones, false));
    descriptor_parts.extend(relationship_descriptors(&fields.to_manys, true));

    let from_resource = if fields.to_ones.is_empty() && fields.to_manys.is_empty() {
        from_resource(&ast, &entity_type, &fields)
    } else {
        quote! {}
    };

    let res = quote! {
        impl #impl_generics jsonapi_serde::entity::Entity for #decorated_struct #ty_generics #where_clause {
            fn ty(&self) -> &str { #entity_type }

            fn id(&self) -> String { self.#id.to_string() }

            fn attributes(&self) -> jsonapi_serde::model::attribute::Attributes {
                let mut attributes = jsonapi_serde::model::attribute::Attributes::new();
                #(
                    attributes.insert(
                        #attr_names.to_owned(),
                        jsonapi_serde::model::attribute::AttributeField::to_attribute_value(&self.#attr_idents),
                    );
                )*
                attributes
            }

            fn relationships(&self) -> Vec<(&'static str, jsonapi_serde::entity::Related<'_>)> {
                vec![
                    #( (#to_one_names, jsonapi_serde::entity::ToOneField::related(&self.#to_one_idents)), )*
                    #( (#to_many_names, jsonapi_serde::entity::ToManyField::related(&self.#to_many_idents)), )*
                ]
            }
        }

        impl #impl_generics jsonapi_serde::entity::Described for #decorated_struct #ty_generics #where_clause {
            const TYPE: &'static str = #entity_type;

            fn descriptor() -> jsonapi_serde::descriptor::ResourceDescriptor {
                jsonapi_serde::descriptor::ResourceDescriptor::new(#entity_type)
                    #( #descriptor_parts )*
            }
        }

        #from_resource
    };
    Ok(res)
}

pub(crate) fn get_meta(attrs: &[syn::Attribute]) -> syn::Result<Vec<syn::Meta>> {
    attrs.iter().filter(|a| a.path.is_ident("entity")).map(|a| a.parse_meta()).collect()
}

fn get_entity_type(ast: &syn::DeriveInput) -> syn::Result<String> {
    for meta in get_meta(&ast.attrs)? {
        if let syn::Meta::List(syn::MetaList { ref nested, .. }) = meta {
            if let Some(syn::NestedMeta::Meta(ref meta_item)) = nested.last() {
                if let syn::Meta::NameValue(syn::MetaNameValue { path, lit: syn::Lit::Str(lit_str), .. }) =
                    meta_item
                {
                    match path.segments.last() {
                        Some(syn::PathSegment { ident, .. }) if ident == "type" => {
                            return Ok(lit_str.value());
                        },
                        _ => {},
                    }
                }
            }
        }
    }

    Err(syn::Error::new_spanned(ast, EntityDecoratorError::InvalidEntityType))
}

fn get_fields(ast: &syn::DeriveInput) -> syn::Result<FieldBundle> {
    if let syn::Data::Struct(syn::DataStruct {
        fields: syn::Fields::Named(syn::FieldsNamed { ref named, .. }),
        ..
    }) = ast.data
    {
        let mut id = None;
        let mut attrs = vec![];
        let mut read_onlys = vec![];
        let mut skips = vec![];
        let mut to_ones = vec![];
        let mut to_manys = vec![];

        for n in named {
            let f: FieldType = get_field_type(n)?;
            match (f, n.ident.as_ref()) {
                (_, None) => return Err(syn::Error::new_spanned(n, EntityDecoratorError::FieldWithoutName)),
                (FieldType::Id, Some(ident)) if id.is_none() => id = Some(ident),
                (FieldType::Id, Some(_)) => {
                    return Err(syn::Error::new_spanned(n, EntityDecoratorError::DuplicatedId))
                },
                (FieldType::ToOne, Some(_)) => to_ones.push(n),
                (FieldType::ToMany, Some(_)) => to_manys.push(n),
                (FieldType::Skip, Some(ident)) => skips.push(ident),
                (FieldType::ReadOnly, Some(_)) => read_onlys.push(n),
                (FieldType::Plain, Some(_)) => attrs.push(n),
            }
        }

        return match id {
            Some(id) => Ok(FieldBundle { id, attrs, read_onlys, skips, to_ones, to_manys }),
            None => Err(syn::Error::new_spanned(&ast.ident, EntityDecoratorError::MissingId)),
        };
    }
    Err(syn::Error::new_spanned(&ast.ident, EntityDecoratorError::InvalidEntityType))
}
