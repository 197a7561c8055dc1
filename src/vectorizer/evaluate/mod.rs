pub mod rating;
