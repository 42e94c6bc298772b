mod prop_query;
mod prop_update;
