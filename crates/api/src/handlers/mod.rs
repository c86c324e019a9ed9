pub mod files;
pub mod jobs;
pub mod outlines;
pub mod podcasts;
pub mod reports;
