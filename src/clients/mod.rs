pub mod upower;
