pub mod encoded_image;

pub use encoded_image::{EncodedImageField, FieldError, HydratedImage, InMemoryUpload};
