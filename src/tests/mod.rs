mod asynch;
mod buffer;
mod stack;
