//! Value converters for form inputs.
//!
//! [`text`] converts between typed values and input strings. [`binding`]
//! packages those conversions as field bindings for
//! [`FormStore::register_field`](formstate_store::FormStore::register_field).

pub mod binding;
pub mod text;

pub use binding::{
    date_field, datetime_field, nullable_number_field, nullable_text_field, number_field,
    number_value,
};
pub use text::{
    date_deserialize, date_serialize, datetime_deserialize, datetime_serialize,
    nullable_deserialize, nullable_serialize, number_deserialize, number_nullable_deserialize,
    number_serialize,
};
