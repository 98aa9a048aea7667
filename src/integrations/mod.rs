pub mod timeflip;
