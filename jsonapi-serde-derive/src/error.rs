#[derive(Error, Debug)]
pub enum EntityDecoratorError {
    #[error(
        "`to_one` decorator can only be used on `Option<T>`, `Box<T>` or `&T` where T is an \
         entity"
    )]
    InvalidToOneType,
    #[error("`to_many` decorator can only be used on `Vec<T>` or `HashSet<T>` where T is an entity")]
    InvalidToManyType,
    #[error(
        "`EntityDecorator` macro can only be used on Named Structs with `id` decorator, just like \
         `#[entity(type = \"foo_type\")]`"
    )]
    InvalidEntityType,
    #[error("Missing `id` decorator, exactly one field must be marked with `#[entity(id)]`")]
    MissingId,
    #[error("Duplicated Id fields detected")]
    DuplicatedId,
    #[error("Invalid unit decorator {0}, the valid ones: [id, to_one, to_many, skip, read_only]")]
    InvalidUnitDecorator(String),
    #[error("Field without name")]
    FieldWithoutName,
}
