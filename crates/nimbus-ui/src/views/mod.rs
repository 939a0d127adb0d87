pub mod weather_view;
