pub mod hexgrid;
pub mod run;
