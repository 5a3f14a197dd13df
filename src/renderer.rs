pub mod bones;
