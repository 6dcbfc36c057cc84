pub mod online_user;
