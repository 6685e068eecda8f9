mod allocator;
mod registry;
