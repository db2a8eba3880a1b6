//! Reference image handling
//!
//! Decodes user-supplied reference images before they are uploaded and
//! detects the format the upload is labelled with.

pub mod reference;

pub use reference::ReferenceImage;
