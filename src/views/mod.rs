pub mod field_view;

pub use field_view::FieldView;
