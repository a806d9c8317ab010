/// Lets `?` turn foreign errors the crate does not look into into `JsonApiSerdeError::Unhandled`
macro_rules! unhandled_errors {
    ($($ty:path),+ $(,)?) => {
        $(
            impl From<$ty> for $crate::error::JsonApiSerdeError {
                fn from(err: $ty) -> Self { $crate::error::JsonApiSerdeError::Unhandled(Box::new(err)) }
            }
        )+
    };
}

/// Declares `LinksRepr` from `"member name" => field` pairs.
///
/// The pairs fix the set of link names the crate knows and the order they render in.
macro_rules! links_repr {
    ($(#[$attr:meta])* $name:ident { $($member:literal => $field:ident),+ $(,)? }) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(pub $field: Option<Link>,)+
            pub source: Option<JsonPointer>,
        }

        impl $name {
            pub const NAMES: &'static [&'static str] = &[$($member),+];

            pub fn get(&self, name: &str) -> Option<&Link> {
                match name {
                    $($member => self.$field.as_ref(),)+
                    _ => None,
                }
            }

            /// Returns the slot for `name`, `None` for a name that is not a known link
            pub fn get_mut(&mut self, name: &str) -> Option<&mut Option<Link>> {
                match name {
                    $($member => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}
