pub mod clipfile;
