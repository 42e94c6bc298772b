mod mod_collection;
