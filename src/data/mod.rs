pub mod cifar;
