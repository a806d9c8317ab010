use crate::error::EntityDecoratorError;
use crate::get_meta;
use quote::ToTokens;

lazy_static! {
    static ref VALID_TO_ONE_WRAPPER: Vec<&'static str> = vec!["Option", "Box"];
    static ref VALID_TO_MANY_WRAPPER: Vec<&'static str> = vec!["Vec", "HashSet"];
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum FieldType {
    Id,
    ToOne,
    ToMany,
    Skip,
    ReadOnly,
    Plain,
}

fn invalid_decorator(meta_item: &syn::Meta) -> syn::Error {
    syn::Error::new_spanned(
        meta_item,
        EntityDecoratorError::InvalidUnitDecorator(meta_item.path().segments.to_token_stream().to_string()),
    )
}

pub(crate) fn get_field_type(item: &syn::Field) -> syn::Result<FieldType> {
    if let Some(syn::Meta::List(syn::MetaList { ref nested, .. })) = get_meta(&item.attrs)?.last() {
        if let Some(syn::NestedMeta::Meta(ref meta_item)) = nested.last() {
            let field_ty = match meta_item {
                syn::Meta::Path(path) => match path.get_ident() {
                    Some(ident) => ident,
                    None => return Err(invalid_decorator(meta_item)),
                },
                _ => return Err(invalid_decorator(meta_item)),
            };
            let res = if field_ty == "id" {
                FieldType::Id
            } else if field_ty == "to_one" {
                check_wrapper(&item.ty, &VALID_TO_ONE_WRAPPER, true, EntityDecoratorError::InvalidToOneType)?;
                FieldType::ToOne
            } else if field_ty == "to_many" {
                check_wrapper(&item.ty, &VALID_TO_MANY_WRAPPER, false, EntityDecoratorError::InvalidToManyType)?;
                FieldType::ToMany
            } else if field_ty == "skip" {
                FieldType::Skip
            } else if field_ty == "read_only" {
                FieldType::ReadOnly
            } else {
                return Err(syn::Error::new_spanned(
                    field_ty,
                    EntityDecoratorError::InvalidUnitDecorator(field_ty.to_string()),
                ));
            };
            return Ok(res);
        }
    }

    Ok(FieldType::Plain)
}

fn check_wrapper(
    ty: &syn::Type, wrappers: &[&'static str], allow_ref: bool, err: EntityDecoratorError,
) -> syn::Result<()> {
    match ty {
        syn::Type::Reference(_) if allow_ref => return Ok(()),
        syn::Type::Path(syn::TypePath { path, .. }) => {
            if let Some(seg) = path.segments.last() {
                if wrappers.iter().any(|w| seg.ident == *w) {
                    return Ok(());
                }
            }
        },
        _ => {},
    }
    Err(syn::Error::new_spanned(ty, err))
}
