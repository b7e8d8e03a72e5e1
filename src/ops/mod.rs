mod directory;
mod file;
mod tree;
