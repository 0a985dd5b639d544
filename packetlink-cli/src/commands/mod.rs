pub mod checksum;
pub mod decode;
pub mod encode;
pub mod replay;
pub mod scan;
pub mod selftest;
