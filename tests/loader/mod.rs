mod eviction;
mod incremental;
mod propagation;
