// cooperative task scheduler for single-core microcontrollers

#![cfg_attr(not(test), no_std)]

pub mod kernel;
