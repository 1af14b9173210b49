pub mod render_worker;
