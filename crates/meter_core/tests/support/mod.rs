#![allow(dead_code)]

pub mod ride;
