mod reachability;
