mod mapping_samples;
mod readings;
