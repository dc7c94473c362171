pub mod api_gateway;
pub mod match_ride;
pub mod ride_api;
pub mod send_notification;
