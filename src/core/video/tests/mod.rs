mod batch;
mod lifecycle;
