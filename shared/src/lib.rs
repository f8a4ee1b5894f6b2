#![no_std]

//! Names, registry locations and Win32 codes shared by the UsbDk tooling.

pub mod constants;
