mod local_transient_store;

pub use local_transient_store::LocalTransientStore;
