mod map;
mod popup;
