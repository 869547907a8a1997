mod test_membership_notices;
mod test_room_lifetime;
