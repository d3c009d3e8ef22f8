pub mod centroid;
pub mod color_segmenter;
pub mod frame;
pub mod pixel;
pub mod scoring;
pub mod tracker;
