pub mod converter;
pub mod formatting;
pub mod pointer;

pub use self::converter::{
    AttributeType, ConverterContext, CustomConverter, DefaultConverterContext,
    ErrorCollectingConverterContext, TypedValueConverter, ValidationError,
};
pub use self::formatting::english_enumerate;
pub use self::pointer::JsonPointer;
